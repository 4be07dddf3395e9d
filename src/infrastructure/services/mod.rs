mod match_runtime;

pub use match_runtime::MatchRuntime;
