//! Settings context stack
//!
//! The resolved [`Settings`] in effect for a unit of work are carried by a
//! [`SettingsContext`] frame. Frames are entered two ways:
//!
//! - synchronously with [`enter`], which pushes onto a thread-local stack and
//!   returns a [`ContextGuard`]; dropping the guard restores the previous top on
//!   every exit path, including early returns and panics
//! - around a future with [`scope`], which binds the frame to the task through a
//!   `tokio` task-local so concurrent tasks never see each other's frames
//!
//! Thread-stack entries remember the tokio task that entered them and are
//! invisible to every other task sharing the thread. Every frame carries a
//! sequence number, and [`current`] returns the most recently entered frame
//! visible to the caller, whichever way it was entered. There is no implicit
//! bottom frame: with nothing entered, [`current`] fails with
//! [`SettingsError::NoActiveContext`].
//!
//! # Example
//!
//! ```rust
//! use prefect_settings::profiles::ProfilesCollection;
//! use prefect_settings::settings::context::{self, ContextRequest, SettingsSources};
//! use prefect_settings::settings::{EnvSnapshot, Registry, SettingValue};
//!
//! let registry = Registry::builtin();
//! let env = EnvSnapshot::default();
//! let profiles = ProfilesCollection::with_default_profile();
//! let sources = SettingsSources::new(&registry, &env, &profiles);
//!
//! let _root = context::use_profile(&sources, ContextRequest::fresh(), None).unwrap();
//! {
//!     let _debug = context::temporary_settings(
//!         &registry,
//!         [("PREFECT_DEBUG_MODE", SettingValue::Boolean(true))],
//!     )
//!     .unwrap();
//!     let current = context::current().unwrap();
//!     assert_eq!(current.value("PREFECT_DEBUG_MODE"), Some(&SettingValue::Boolean(true)));
//! }
//! let current = context::current().unwrap();
//! assert_eq!(current.value("PREFECT_DEBUG_MODE"), Some(&SettingValue::Boolean(false)));
//! ```

use crate::domain::{Result, SettingsError};
use crate::profiles::ProfilesCollection;
use crate::settings::registry::Registry;
use crate::settings::resolver::{resolve, EnvSnapshot, Overrides, Settings};
use crate::settings::value::SettingValue;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// An entered frame and where it is visible
#[derive(Debug, Clone)]
struct Frame {
    sequence: u64,
    /// Task that entered the frame; `None` outside any tokio task
    owner: Option<task::Id>,
    context: Arc<SettingsContext>,
}

impl Frame {
    fn new(context: Arc<SettingsContext>) -> Self {
        Self {
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            owner: task::try_id(),
            context,
        }
    }
}

thread_local! {
    static STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    static TASK_FRAME: Frame;
}

/// One frame of the context stack
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsContext {
    settings: Arc<Settings>,
    profile: Option<String>,
}

impl SettingsContext {
    pub fn new(settings: Settings, profile: Option<String>) -> Self {
        Self {
            settings: Arc::new(settings),
            profile,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Name of the profile the frame was resolved with, if any
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn value(&self, name: &str) -> Option<&SettingValue> {
        self.settings.value(name)
    }
}

/// Restores the previous top frame when dropped
///
/// Not `Send`: a guard must be dropped on the thread that created it, and must
/// not be held across an `.await`.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub struct ContextGuard {
    sequence: u64,
    owner: Option<task::Id>,
    context: Arc<SettingsContext>,
    hook: Option<Arc<dyn ContextHook>>,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// Frame entered by this guard
    pub fn context(&self) -> &Arc<SettingsContext> {
        &self.context
    }
}

impl std::fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGuard")
            .field("sequence", &self.sequence)
            .field("profile", &self.context.profile)
            .finish()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let _ = STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            let Some(position) = stack.iter().position(|f| f.sequence == self.sequence) else {
                return;
            };
            // Frames the same task entered above this one belong to leaked guards
            let mut index = 0;
            stack.retain(|f| {
                let keep = index < position || f.owner != self.owner;
                index += 1;
                keep
            });
        });
        tracing::trace!(sequence = self.sequence, "Exited settings context");

        if let Some(hook) = &self.hook {
            let restored = current().ok();
            if let Err(e) = hook.on_exit(restored.as_deref()) {
                tracing::warn!(error = %e, "Settings context exit hook failed");
            }
        }
    }
}

/// Pushes a frame onto this thread's stack
pub fn enter(context: SettingsContext) -> ContextGuard {
    enter_with_hook(Arc::new(context), None)
}

fn enter_with_hook(context: Arc<SettingsContext>, hook: Option<Arc<dyn ContextHook>>) -> ContextGuard {
    let frame = Frame::new(Arc::clone(&context));
    let (sequence, owner) = (frame.sequence, frame.owner);
    STACK.with(|stack| stack.borrow_mut().push(frame));
    tracing::trace!(sequence, profile = ?context.profile, "Entered settings context");
    ContextGuard {
        sequence,
        owner,
        context,
        hook,
        _not_send: PhantomData,
    }
}

/// Runs `future` with `context` as the task's frame
///
/// Scopes nest; the outer frame is visible again once the inner future
/// completes.
pub async fn scope<F: Future>(context: SettingsContext, future: F) -> F::Output {
    let frame = Frame::new(Arc::new(context));
    TASK_FRAME.scope(frame, future).await
}

/// Innermost frame visible from the caller
///
/// # Errors
///
/// [`SettingsError::NoActiveContext`] when no frame has been entered.
pub fn current() -> Result<Arc<SettingsContext>> {
    let owner = task::try_id();
    let entered = STACK
        .try_with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|f| f.owner == owner)
                .map(|f| (f.sequence, Arc::clone(&f.context)))
        })
        .ok()
        .flatten();
    let scoped = TASK_FRAME
        .try_with(|f| (f.sequence, Arc::clone(&f.context)))
        .ok();

    entered
        .into_iter()
        .chain(scoped)
        .max_by_key(|(sequence, _)| *sequence)
        .map(|(_, context)| context)
        .ok_or(SettingsError::NoActiveContext)
}

/// Inputs for computing a fresh frame
#[derive(Debug, Clone, Copy)]
pub struct SettingsSources<'a> {
    pub registry: &'a Registry,
    pub env: &'a EnvSnapshot,
    pub profiles: &'a ProfilesCollection,
}

impl<'a> SettingsSources<'a> {
    pub fn new(
        registry: &'a Registry,
        env: &'a EnvSnapshot,
        profiles: &'a ProfilesCollection,
    ) -> Self {
        Self {
            registry,
            env,
            profiles,
        }
    }
}

/// How a new frame relates to the current one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Inheritance {
    /// Resolve from the registry, environment and profiles from scratch
    #[default]
    Fresh,
    /// Start from the current frame's snapshot and layer on top of it
    Parent,
}

/// Request for a new frame: which profile, which overrides, which base
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    profile: Option<String>,
    overrides: Overrides,
    inheritance: Inheritance,
}

impl ContextRequest {
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn inherit() -> Self {
        Self {
            inheritance: Inheritance::Parent,
            ..Self::default()
        }
    }

    /// Selects a profile by name instead of the active one
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn inheritance(&self) -> Inheritance {
        self.inheritance
    }
}

/// Side effects triggered when frames are entered and exited
pub trait ContextHook {
    /// Called after `context` was built and before it is entered
    ///
    /// An error aborts the entry.
    fn on_enter(&self, context: &SettingsContext) -> Result<()>;

    /// Called after a frame was exited, with the frame now visible
    fn on_exit(&self, _restored: Option<&SettingsContext>) -> Result<()> {
        Ok(())
    }
}

/// Hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl ContextHook for NoopHook {
    fn on_enter(&self, _context: &SettingsContext) -> Result<()> {
        Ok(())
    }
}

/// Builds the frame described by `request` without entering it
///
/// # Errors
///
/// - [`SettingsError::ProfileNotFound`] if the requested profile does not exist
/// - [`SettingsError::NoActiveContext`] for [`Inheritance::Parent`] with no
///   current frame
/// - any resolution error from [`resolve`]
pub fn build_context(sources: &SettingsSources<'_>, request: &ContextRequest) -> Result<SettingsContext> {
    match request.inheritance {
        Inheritance::Fresh => {
            let settings = resolve(
                sources.registry,
                sources.env,
                sources.profiles,
                request.profile.as_deref(),
                &request.overrides,
            )?;
            let profile = request
                .profile
                .clone()
                .or_else(|| sources.profiles.active_name().map(str::to_string));
            Ok(SettingsContext::new(settings, profile))
        }
        Inheritance::Parent => {
            let parent = current()?;
            let (settings, profile) = match &request.profile {
                Some(name) => {
                    let profile = sources.profiles.require(name)?;
                    let settings = parent.settings().layer_profile(sources.registry, profile)?;
                    (settings, Some(name.clone()))
                }
                None => (parent.settings().clone(), parent.profile.clone()),
            };
            let settings = settings.layer(sources.registry, &request.overrides)?;
            Ok(SettingsContext::new(settings, profile))
        }
    }
}

/// Builds and enters a frame, running `hook` around it
///
/// # Errors
///
/// Any error from [`build_context`] or from the hook's `on_enter`; in both cases
/// nothing is entered.
pub fn use_profile(
    sources: &SettingsSources<'_>,
    request: ContextRequest,
    hook: Option<Arc<dyn ContextHook>>,
) -> Result<ContextGuard> {
    let context = build_context(sources, &request)?;
    if let Some(hook) = &hook {
        hook.on_enter(&context)?;
    }
    tracing::debug!(
        profile = ?context.profile(),
        inheritance = ?request.inheritance,
        "Using settings profile"
    );
    Ok(enter_with_hook(Arc::new(context), hook))
}

/// Enters a frame that layers `overrides` on the current one
///
/// # Errors
///
/// [`SettingsError::NoActiveContext`] with no current frame, or the errors of
/// [`Settings::layer`].
pub fn temporary_settings<K, I>(registry: &Registry, overrides: I) -> Result<ContextGuard>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, SettingValue)>,
{
    let parent = current()?;
    let overrides: Overrides = overrides.into_iter().map(|(k, v)| (k.into(), v)).collect();
    let settings = parent.settings().layer(registry, &overrides)?;
    Ok(enter(SettingsContext::new(settings, parent.profile.clone())))
}
