mod models;
mod properties;
mod support;
