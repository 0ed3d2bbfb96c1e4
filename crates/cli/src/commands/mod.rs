pub mod agent;
pub mod gateway;
pub mod onboard;
pub mod status;
pub mod todos;
