pub mod byte_buffer;
pub mod input_stream;
pub mod output_stream;
