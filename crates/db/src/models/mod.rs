pub mod accident_record;
