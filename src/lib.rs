pub mod activities;
pub mod app_config;
pub mod auth;
pub mod commons;
pub mod community;
pub mod db;
pub mod email;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod orm;
pub mod session;
pub mod sse;
pub mod storage;
pub mod web;
