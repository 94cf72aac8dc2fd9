mod tests_basic;
mod tests_concurrency;
mod tests_free_list;
