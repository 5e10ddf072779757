//! Entry point for the component unit tests under `tests/unit/`

mod unit;
