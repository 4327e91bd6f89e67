pub mod disconnect;
