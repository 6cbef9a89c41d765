//! Declarative macros for ergonomic effect construction.
//!
//! These macros reduce boilerplate when creating `Effect` variants for the
//! snapshot store and notification delivery operations.

/// Create an `Effect::Snapshot` with a `Save` operation.
///
/// # Example
///
/// ```rust,ignore
/// use tombola_core::save_snapshot;
///
/// save_snapshot! {
///     store: env.snapshot_store,
///     document: env.document.clone(),
///     expected_version: state.version(),
///     state: encoded,
///     on_success: |version| Some(EnrollmentAction::SnapshotSaved { version }),
///     on_error: |error| Some(EnrollmentAction::SnapshotFailed { reason: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! save_snapshot {
    (
        store: $store:expr,
        document: $document:expr,
        expected_version: $expected:expr,
        state: $state:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Snapshot($crate::effect::SnapshotOperation::Save {
            store: ::std::sync::Arc::clone(&$store),
            document: $document,
            expected_version: $expected,
            state: $state,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Snapshot` with a `Load` operation.
///
/// # Example
///
/// ```rust,ignore
/// use tombola_core::load_snapshot;
///
/// load_snapshot! {
///     store: env.snapshot_store,
///     document: env.document.clone(),
///     on_success: |snapshot| Some(EnrollmentAction::SnapshotLoaded { snapshot }),
///     on_error: |error| Some(EnrollmentAction::SnapshotFailed { reason: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! load_snapshot {
    (
        store: $store:expr,
        document: $document:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Snapshot($crate::effect::SnapshotOperation::Load {
            store: ::std::sync::Arc::clone(&$store),
            document: $document,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Notify` operation.
///
/// # Example
///
/// ```rust,ignore
/// use tombola_core::send_notifications;
///
/// send_notifications! {
///     notifier: env.notifier,
///     notifications: batch,
///     on_success: || None,
///     on_error: |error| Some(EnrollmentAction::DeliveryFailed { reason: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! send_notifications {
    (
        notifier: $notifier:expr,
        notifications: $notifications:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::Notify($crate::effect::NotifyOperation {
            notifier: ::std::sync::Arc::clone(&$notifier),
            notifications: $notifications,
            on_success: ::std::boxed::Box::new(move |()| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Future` from an async block.
///
/// # Example
///
/// ```rust,ignore
/// use tombola_core::async_effect;
///
/// async_effect! {
///     let report = audit_log.append(entry).await;
///     report.err().map(|e| EnrollmentAction::AuditFailed { reason: e })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions.
///
/// # Example
///
/// ```rust,ignore
/// use tombola_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: EnrollmentAction::InvitationExpired { event_id, entrant_id }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
