mod tests_compact;
mod tests_extended;
