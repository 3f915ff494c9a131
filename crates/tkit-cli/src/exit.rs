//! Error presentation and process exit codes.

use tkit_media::MediaError;
use tkit_submit::SubmitError;

/// Generic failure.
pub const EXIT_FAILURE: i32 = 1;
/// Bad input; nothing was attempted.
pub const EXIT_USAGE: i32 = 2;

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<SubmitError>() {
        return match e {
            SubmitError::Validation(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        };
    }
    if let Some(e) = err.downcast_ref::<MediaError>() {
        return match e {
            MediaError::Decode(_) | MediaError::InvalidJob(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        };
    }
    EXIT_FAILURE
}

/// Message shown to the user for a failed command.
pub fn describe(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<SubmitError>() {
        return e.user_message();
    }
    if let Some(e) = err.downcast_ref::<MediaError>() {
        return e.user_message();
    }
    format!("{:#}", err)
}
