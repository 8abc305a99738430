mod library;

pub use library::LibraryManager;
