#![allow(dead_code)]

pub use forgedag_test_utils::builders;
pub use forgedag_test_utils::tasks;
pub use forgedag_test_utils::{init_tracing, with_timeout};
