pub mod llm;
pub mod messages;
pub mod rag;
pub mod supervisor;
pub mod traits;
