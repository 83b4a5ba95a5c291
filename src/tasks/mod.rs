pub mod live_view;
