pub mod audit;
pub mod auth;
pub mod comment;
pub mod customer;
pub mod notification;
pub mod nullable;
pub mod pagination;
pub mod project;
pub mod settings;
pub mod task;
pub mod ticket;
