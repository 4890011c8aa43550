pub mod config;
pub mod db;
pub mod rbac;
pub mod services;
pub mod web;
pub mod webhooks;
