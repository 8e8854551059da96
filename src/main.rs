#[rocket::launch]
fn rocket() -> _ {
    channelstream::rocket()
}
