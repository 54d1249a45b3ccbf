pub mod order_execution_client;
