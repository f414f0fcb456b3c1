// Library entry exposing assembler modules.
pub mod assembler;
pub mod hexfile;
pub mod instructions;
pub mod reporter;
pub mod source;
pub mod symbol_table;
pub mod tokenizer;
