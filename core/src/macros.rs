/// Implements a basic `Debug` trait for types using their type name.
///
/// This macro generates a `Debug` implementation that simply prints the type name,
/// useful for types wrapping closures or other opaque state.
macro_rules! impl_debug {
    ($ty:ty) => {
        impl core::fmt::Debug for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(core::any::type_name::<Self>())
            }
        }
    };
}

/// Builds a [`Node`](crate::Node) from a target, optional props and any number of children.
///
/// Every child is converted with [`Into<Child>`](crate::Child), so strings, numbers and
/// nodes can be mixed freely.
///
/// # Usage
///
/// ```rust
/// use jiffy_core::{Props, composable};
///
/// let list = composable!("ul", Props::new().with("class", "items"),
///     composable!("li", Props::new(), "one"),
///     composable!("li", Props::new(), 2),
/// );
/// assert_eq!(list.children().len(), 2);
///
/// let empty = composable!("br");
/// assert!(empty.children().is_empty());
/// ```
#[macro_export]
macro_rules! composable {
    ($target:expr) => {
        $crate::composable($target, $crate::Props::new(), ::std::vec::Vec::<$crate::Child>::new())
    };
    ($target:expr, $props:expr $(, $child:expr)* $(,)?) => {
        $crate::composable(
            $target,
            $props,
            ::std::vec![$($crate::Child::from($child)),*],
        )
    };
}
