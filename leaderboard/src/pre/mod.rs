pub mod board_opts;
pub mod read_board_pars;
