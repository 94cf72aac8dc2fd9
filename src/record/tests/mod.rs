mod tests_find;
mod tests_object_ops;
