//! Cartography: robots.txt, sitemaps, layout URL shapes and link discovery.

pub mod discover;
pub mod layout_url;
pub mod robots;
pub mod sitemap;
