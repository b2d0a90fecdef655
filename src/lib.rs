pub mod app;
pub mod experiment;
pub mod net;
pub mod proto;
pub mod queue;
pub mod sim;

#[cfg(test)]
mod test;
