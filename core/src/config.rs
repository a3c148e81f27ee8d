//! Runtime and per-render configuration.

use std::rc::Rc;

use crate::{error::ConfigError, runtime::Rendered};

const LOCK_SCOPE_VAR: &str = "JIFFY_LOCK_SCOPE";
const COALESCE_VAR: &str = "JIFFY_COALESCE_RERENDERS";

/// How composition passes are serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockScope {
    /// One pass at a time across every render target.
    #[default]
    Global,
    /// One pass at a time per render target; different targets may interleave.
    PerTarget,
}

impl core::str::FromStr for LockScope {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "per-target" | "per_target" | "target" => Ok(Self::PerTarget),
            _ => Err(ConfigError::InvalidValue {
                key: LOCK_SCOPE_VAR,
                value: value.to_owned(),
            }),
        }
    }
}

/// Configuration of a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    lock_scope: LockScope,
    coalesce_rerenders: bool,
}

impl RuntimeConfig {
    /// Default configuration: global lock, no coalescing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock_scope: LockScope::Global,
            coalesce_rerenders: false,
        }
    }

    /// Reads `JIFFY_LOCK_SCOPE` and `JIFFY_COALESCE_RERENDERS`, falling back to defaults
    /// for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to something unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        if let Some(scope) = lookup(LOCK_SCOPE_VAR) {
            config.lock_scope = scope.parse()?;
        }
        if let Some(flag) = lookup(COALESCE_VAR) {
            config.coalesce_rerenders = parse_flag(COALESCE_VAR, &flag)?;
        }
        Ok(config)
    }

    /// Sets the lock scope.
    #[must_use]
    pub const fn lock_scope(mut self, scope: LockScope) -> Self {
        self.lock_scope = scope;
        self
    }

    /// Collapses queued re-render requests for the same target into one pass.
    #[must_use]
    pub const fn coalesce_rerenders(mut self, coalesce: bool) -> Self {
        self.coalesce_rerenders = coalesce;
        self
    }

    /// The configured lock scope.
    #[must_use]
    pub const fn scope(&self) -> LockScope {
        self.lock_scope
    }

    /// Whether queued re-render requests are coalesced.
    #[must_use]
    pub const fn coalesces(&self) -> bool {
        self.coalesce_rerenders
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_owned(),
        }),
    }
}

type RerenderCallback<T> = Rc<dyn Fn(&Rendered<T>)>;

/// Options for one [`Runtime::render`](crate::Runtime::render) call.
pub struct RenderOptions<T> {
    pub(crate) allow_rerender: bool,
    pub(crate) on_rerender: Option<RerenderCallback<T>>,
}

impl<T> RenderOptions<T> {
    /// No re-render subscription.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allow_rerender: false,
            on_rerender: None,
        }
    }

    /// Subscribes the target to re-render requests raised by state setters.
    #[must_use]
    pub const fn allow_rerender(mut self, allow: bool) -> Self {
        self.allow_rerender = allow;
        self
    }

    /// Calls `callback` with the result of every re-render. Implies a subscription.
    #[must_use]
    pub fn on_rerender(mut self, callback: impl Fn(&Rendered<T>) + 'static) -> Self {
        self.on_rerender = Some(Rc::new(callback));
        self
    }

    /// Whether this render installs a re-render subscription.
    #[must_use]
    pub const fn subscribes(&self) -> bool {
        self.allow_rerender || self.on_rerender.is_some()
    }
}

impl<T> Default for RenderOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RenderOptions<T> {
    fn clone(&self) -> Self {
        Self {
            allow_rerender: self.allow_rerender,
            on_rerender: self.on_rerender.clone(),
        }
    }
}

impl<T> core::fmt::Debug for RenderOptions<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("allow_rerender", &self.allow_rerender)
            .field("on_rerender", &self.on_rerender.is_some())
            .finish()
    }
}
