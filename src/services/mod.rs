// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod mediator_service;

#[cfg(test)]
mod mediator_service_tests;

pub use mediator_service::MediatorService;
