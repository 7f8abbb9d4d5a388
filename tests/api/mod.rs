mod auth_tests;
mod health_tests;
mod tools_tests;
