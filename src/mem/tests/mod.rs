mod tests_cursor;
mod tests_varuint;
