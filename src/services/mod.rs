// 服务层模块
pub mod analysis_pipeline;
pub mod analysis_worker;
pub mod findings_parser;
pub mod vision_client;
pub mod vision_mock;

pub use analysis_pipeline::{AnalysisJob, AnalysisPipeline, PipelineOutcome};
pub use analysis_worker::{AnalysisCompletion, AnalysisWorkerPool, JobHandle, JobSlot};
pub use findings_parser::{FindingsOutcome, parse_findings};
pub use vision_client::{HttpVisionClient, InferenceError, VisionClient, VisionRequest};
pub use vision_mock::{FailingVisionClient, StaticVisionClient};
