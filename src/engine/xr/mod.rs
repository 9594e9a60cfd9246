pub mod coordinator;
pub mod enumerate;
pub mod events;
pub mod instance;
pub mod negotiator;
pub mod openxr_runtime;
pub mod runtime;
pub mod session;

#[cfg(test)]
pub mod mock;


pub use coordinator::run;
