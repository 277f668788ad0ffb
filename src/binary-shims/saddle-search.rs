fn main() { saddle_tasks::entry_points::saddle_search(); }
