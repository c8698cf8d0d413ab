use time::macros::format_description;

fn main() {
    let now = time::OffsetDateTime::now_utc();
    let date_fmt = format_description!("[month repr:short] [day padding:space] [year]");
    let time_fmt = format_description!("[hour]:[minute]:[second]");

    let date = std::env::var("BVH_SCENE_BUILD_DATE")
        .unwrap_or_else(|_| now.format(date_fmt).unwrap_or_else(|_| "unknown".to_string()));
    let time = std::env::var("BVH_SCENE_BUILD_TIME")
        .unwrap_or_else(|_| now.format(time_fmt).unwrap_or_else(|_| "unknown".to_string()));

    println!("cargo:rerun-if-env-changed=BVH_SCENE_BUILD_DATE");
    println!("cargo:rerun-if-env-changed=BVH_SCENE_BUILD_TIME");
    println!("cargo:rustc-env=BVH_SCENE_BUILD_DATE={}", date);
    println!("cargo:rustc-env=BVH_SCENE_BUILD_TIME={}", time);
}
