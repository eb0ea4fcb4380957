pub mod conversation;
pub mod data_source;
pub mod message;
pub mod task;

pub use conversation::ConversationRecord;
pub use data_source::{ContextRecord, DataSourceRecord, NewContext, NewDataSource};
pub use message::{MessageRecord, NewMessage, Role};
pub use task::{NewTask, TaskRecord};
