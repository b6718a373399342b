/// Property-style checks of the scheduling core through the public API
mod properties;
mod planning;
