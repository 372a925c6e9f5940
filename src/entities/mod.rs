pub mod payment_order;
