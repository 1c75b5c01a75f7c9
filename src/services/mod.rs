pub mod fetch_audit;
