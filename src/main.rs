fn main() {
  if let Err(e) = thrust_stand_lib::run() {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}
