pub mod planet;
