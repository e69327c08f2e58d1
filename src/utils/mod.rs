//! Shared utilities: Arrow column coercion, logging and progress reporting

pub mod arrow;
pub mod logging;
#[cfg(test)]
pub mod test_utils;

pub use logging::{
    create_main_progress_bar, finish_progress_bar, log_operation_complete, log_operation_start,
    log_warning,
};
