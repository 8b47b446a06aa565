pub mod memory;
pub mod supabase;

pub use memory::InMemoryRecordStore;
pub use supabase::SupabaseRecordStore;
