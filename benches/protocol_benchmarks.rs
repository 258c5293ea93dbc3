use airplay_video::media::MediaSource;
use airplay_video::plist_dict;
use airplay_video::protocol::http::HttpCodec;
use airplay_video::protocol::plist::{PlistValue, decode, xml};
use airplay_video::protocol::video::{PlaybackInfo, VideoRequests};
use airplay_video::PlayBody;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn playback_info_plist() -> PlistValue {
    let range = |start: f64, duration: f64| plist_dict! { "start" => start, "duration" => duration };
    plist_dict! {
        "duration" => 5400.0,
        "position" => 1234.567,
        "rate" => 1.0,
        "readyToPlay" => true,
        "playbackBufferEmpty" => false,
        "playbackBufferFull" => false,
        "playbackLikelyToKeepUp" => true,
        "loadedTimeRanges" => vec![range(1200.0, 95.5)],
        "seekableTimeRanges" => vec![range(0.0, 5400.0)],
    }
}

fn plist_benchmark(c: &mut Criterion) {
    let value = playback_info_plist();
    let encoded = xml::encode(&value);

    c.bench_function("plist_decode_playback_info", |b| {
        b.iter(|| decode(black_box(&encoded)).unwrap())
    });

    c.bench_function("plist_encode_playback_info", |b| {
        b.iter(|| xml::encode(black_box(&value)))
    });

    c.bench_function("playback_info_from_plist", |b| {
        b.iter(|| PlaybackInfo::from_plist(black_box(&value)).unwrap())
    });
}

fn http_benchmark(c: &mut Criterion) {
    let requests = VideoRequests::new("1A2B3C4D-0000-4000-8000-00000000ABCD", "MediaControl/1.0");
    let media = MediaSource::new("http://192.168.1.20:8080/movie.mp4");

    c.bench_function("http_encode_play_request", |b| {
        b.iter(|| {
            requests
                .play(black_box(&media), PlayBody::TextParameters)
                .encode()
        })
    });

    let body = xml::encode(&playback_info_plist());
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/x-apple-plist+xml\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(&body);

    c.bench_function("http_decode_playback_info_response", |b| {
        b.iter(|| {
            let mut codec = HttpCodec::new();
            codec.feed(black_box(&response)).unwrap();
            codec.decode().unwrap().unwrap()
        })
    });
}

criterion_group!(benches, plist_benchmark, http_benchmark);
criterion_main!(benches);
