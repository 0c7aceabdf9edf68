pub mod bitcask;
