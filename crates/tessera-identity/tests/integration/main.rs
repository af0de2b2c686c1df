mod context_test;
mod db_backend_test;
mod helpers;
mod registration_test;
mod user_store_test;
