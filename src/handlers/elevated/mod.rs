// handlers/elevated/mod.rs - Platform administration (admin/super_admin only)

pub mod clients;
