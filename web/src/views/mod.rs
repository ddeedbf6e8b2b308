mod batch;
pub use batch::Batch;

mod home;
pub use home::Home;

mod job;
pub use job::Job;
