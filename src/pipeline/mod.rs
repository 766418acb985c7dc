mod handler;
mod types;

pub use handler::{DecisionPipeline, PipelineError};
pub use types::{Decision, DecisionBranch, RequestContext, RequestDetails};
