fn main() {
    signflow_lib::run()
}
