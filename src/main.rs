fn main() {
    meterlens_lib::run()
}
