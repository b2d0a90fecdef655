mod address;
mod config;
mod emitter;
mod instrument;
mod queues;
mod runner;
mod tcp;
