fn main() -> Result<(), Box<dyn std::error::Error>> {
    vinyl::runtime::run()
}
