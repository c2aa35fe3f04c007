pub mod figures;
pub mod load;
pub mod records;
