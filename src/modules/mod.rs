pub mod books;

use std::sync::Arc;

use bookshelf_kernel::ModuleRegistry;

use books::store::BookStore;

/// Build the registry with every application module.
pub fn register_all(registry: &mut ModuleRegistry, books: Arc<dyn BookStore>) -> anyhow::Result<()> {
    registry.register(books::create_module(books))?;
    Ok(())
}
