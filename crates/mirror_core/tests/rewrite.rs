use mirror_core::{MarkupRewriter, ResolvedResource, ResourceKind, ResourceLocator, ResourceReference};
use pretty_assertions::assert_eq;

fn local(name: &str) -> ResolvedResource {
    ResolvedResource::Local {
        file_name: name.to_string(),
    }
}

#[test]
fn links_are_rewritten_in_both_quote_styles() {
    let body = r#"<a href="/bbcswebdav/x.pdf">Notes</a> <a href='/bbcswebdav/x.pdf'>again</a>"#;
    let reference = ResourceReference::new("/bbcswebdav/x.pdf", None, ResourceKind::Document, None);
    let out = MarkupRewriter::new("Week 1_files").rewrite(body, &[(reference, local("x.pdf"))]);

    assert_eq!(
        out,
        r#"<a href="Week 1_files/x.pdf">Notes</a> <a href='Week 1_files/x.pdf'>again</a>"#
    );
}

#[test]
fn unavailable_reference_keeps_remote_url_while_others_are_rewritten() {
    let body = r#"<img src="/a.png"><img src="/missing.png"><img src="/b.png">"#;
    let refs = ResourceLocator::new().locate(body);
    let mapping = vec![
        (refs[0].clone(), local("a.png")),
        (refs[1].clone(), ResolvedResource::Unavailable),
        (refs[2].clone(), local("b.png")),
    ];
    let out = MarkupRewriter::new("p_files").rewrite(body, &mapping);

    assert_eq!(
        out,
        r#"<img src="p_files/a.png"><img src="/missing.png"><img src="p_files/b.png">"#
    );
}

#[test]
fn escaped_ampersands_in_markup_are_matched() {
    let body = r#"<img src="/render?id=4&amp;size=full">"#;
    let refs = ResourceLocator::new().locate(body);
    let out = MarkupRewriter::new("d_files").rewrite(body, &[(refs[0].clone(), local("render"))]);

    assert_eq!(out, r#"<img src="d_files/render">"#);
}

#[test]
fn attachment_image_marker_becomes_plain_img() {
    let body = concat!(
        "<p>Before</p>",
        r#"<a href="/bbcswebdav/xid-1_1" data-bbfile="{&quot;fileName&quot;:&quot;diagram.png&quot;,"#,
        r#"&quot;mimeType&quot;:&quot;image/png&quot;,&quot;alternativeText&quot;:&quot;A &amp; B&quot;}">"#,
        "diagram.png</a>",
        "<p>After</p>"
    );
    let refs = ResourceLocator::new().locate(body);
    assert_eq!(refs.len(), 1);
    let out = MarkupRewriter::new("Page_files").rewrite(body, &[(refs[0].clone(), local("diagram.png"))]);

    assert_eq!(
        out,
        concat!(
            "<p>Before</p>",
            r#"<img src="Page_files/diagram.png" alt="A &amp; B" style="max-width: 100%; height: auto;">"#,
            "<p>After</p>"
        )
    );
}

#[test]
fn attachment_image_with_unreadable_metadata_falls_back_to_file_name_alt() {
    let body = r#"<a href="/u/1" data-bbfile="{broken">x</a>"#;
    let reference = ResourceReference::new(
        "/u/1",
        Some("shot.jpg".into()),
        ResourceKind::Attachment,
        Some("image/jpeg".into()),
    );
    let out = MarkupRewriter::new("n_files").rewrite(body, &[(reference, local("shot.jpg"))]);

    assert_eq!(
        out,
        r#"<img src="n_files/shot.jpg" alt="shot.jpg" style="max-width: 100%; height: auto;">"#
    );
}

#[test]
fn same_url_occurrences_all_point_at_one_file() {
    let body = r#"<img src="img.png?v=1"><img src="img.png?v=2"><img src="img.png?v=1">"#;
    let refs = ResourceLocator::new().locate(body);
    assert_eq!(refs.len(), 2);
    let mapping: Vec<_> = refs.into_iter().map(|r| (r, local("img.png"))).collect();
    let out = MarkupRewriter::new("q_files").rewrite(body, &mapping);

    assert_eq!(out, r#"<img src="q_files/img.png"><img src="q_files/img.png"><img src="q_files/img.png">"#);
}

#[test]
fn inline_mode_embeds_image_bytes() {
    let body = r#"<p><img src="/pic.gif" alt="p"></p><img src="/gone.png">"#;
    let refs = ResourceLocator::new().locate(body);
    let mapping = vec![
        (
            refs[0].clone(),
            ResolvedResource::Inline {
                bytes: b"GIF8".to_vec(),
                content_type: Some("image/gif".into()),
            },
        ),
        (refs[1].clone(), ResolvedResource::Unavailable),
    ];
    let out = MarkupRewriter::new("unused_files").rewrite(body, &mapping);

    assert_eq!(
        out,
        r#"<p><img src="data:image/gif;base64,R0lGOA==" alt="p"></p><img src="/gone.png">"#
    );
}

#[test]
fn inline_mode_turns_image_marker_into_embedded_img() {
    let body = r#"<a href="/bbcswebdav/pid/photo.jpg" data-bbfile="{&quot;fileName&quot;:&quot;photo.jpg&quot;,&quot;mimeType&quot;:&quot;image/jpeg&quot;,&quot;displayName&quot;:&quot;Bench&quot;}">photo.jpg</a>"#;
    let refs = ResourceLocator::new().locate(body);
    let mapping = vec![(
        refs[0].clone(),
        ResolvedResource::Inline {
            bytes: b"jpeg".to_vec(),
            content_type: Some("image/jpeg".into()),
        },
    )];
    let out = MarkupRewriter::new("unused_files").rewrite(body, &mapping);

    assert_eq!(
        out,
        r#"<img src="data:image/jpeg;base64,anBlZw==" alt="Bench" style="max-width: 100%; height: auto;">"#
    );
}

#[test]
fn local_names_with_hash_or_percent_are_escaped_in_links() {
    let body = r#"<a href="/docs/notes%231.pdf">n</a><a href="/docs/full.pdf">f</a>"#;
    let refs = ResourceLocator::new().locate(body);
    let mapping = vec![
        (refs[0].clone(), local("notes#1.pdf")),
        (refs[1].clone(), local("100% full.pdf")),
    ];
    let out = MarkupRewriter::new("p_files").rewrite(body, &mapping);

    assert_eq!(
        out,
        r#"<a href="p_files/notes%231.pdf">n</a><a href="p_files/100%25 full.pdf">f</a>"#
    );
}

#[test]
fn non_target_markup_is_untouched() {
    let body = r#"<div class="x"><a href="/keep.html">keep</a><img src="/a.png"></div>"#;
    let refs = ResourceLocator::new().locate(body);
    let out = MarkupRewriter::new("f_files").rewrite(body, &[(refs[0].clone(), local("a.png"))]);

    assert_eq!(out, r#"<div class="x"><a href="/keep.html">keep</a><img src="f_files/a.png"></div>"#);
}
