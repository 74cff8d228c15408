mod reflex_loop;

pub use reflex_loop::{ReflexConfig, ReflexLoop, Reply, ReplySource};
